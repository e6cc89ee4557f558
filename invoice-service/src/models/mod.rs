//! Domain models for invoice-service.

mod invoice;

pub use invoice::{Invoice, InvoiceReconciliation, InvoiceStatus, NewInvoice, UnknownStatus};
