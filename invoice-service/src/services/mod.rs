pub mod events;
pub mod lifecycle;
pub mod memory;
pub mod metrics;
pub mod mock;
pub mod orders;
pub mod postgres;
pub mod reconciliation;
pub mod store;
pub mod xendit;

pub use events::{InvoiceEventPublisher, LogOnlyPublisher, RedisInvoicePublisher};
pub use lifecycle::InvoiceLifecycle;
pub use memory::MemoryInvoiceStore;
pub use metrics::{get_metrics, init_metrics};
pub use orders::{HttpOrderClient, OrderLookup};
pub use postgres::PgInvoiceStore;
pub use reconciliation::CallbackReconciler;
pub use store::{InvoiceStore, Reconciled};
pub use xendit::{PaymentGateway, XenditClient};
