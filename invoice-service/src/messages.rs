//! User-facing messages for invoice endpoints.

pub use service_core::response::messages::*;
use service_core::response::Message;

pub const INVOICE_CREATED: Message = Message::new(
    "INVOICE_CREATED",
    "Invoice created successfully",
    "Tagihan berhasil dibuat",
);
pub const INVOICE_RETRIEVED: Message = Message::new(
    "INVOICE_RETRIEVED",
    "Invoice retrieved successfully",
    "Tagihan berhasil diambil",
);
pub const INVOICE_UPDATED: Message = Message::new(
    "INVOICE_UPDATED",
    "Invoice updated successfully",
    "Tagihan berhasil diperbarui",
);
pub const INVOICE_DELETED: Message = Message::new(
    "INVOICE_DELETED",
    "Invoice deleted successfully",
    "Tagihan berhasil dihapus",
);
pub const INVOICE_NOT_FOUND: Message = Message::new(
    "INVOICE_NOT_FOUND",
    "Invoice not found",
    "Tagihan tidak ditemukan",
);
pub const INVOICE_ALREADY_EXISTS: Message = Message::new(
    "INVOICE_ALREADY_EXISTS",
    "Invoice already exists for this order",
    "Tagihan sudah ada untuk pesanan ini",
);
pub const ORDER_NOT_FOUND: Message = Message::new(
    "ORDER_NOT_FOUND",
    "Order not found",
    "Pesanan tidak ditemukan",
);
pub const FAILED_TO_CREATE_INVOICE: Message = Message::new(
    "FAILED_TO_CREATE_INVOICE",
    "Failed to create invoice",
    "Gagal membuat tagihan",
);
pub const INVALID_STATUS_TRANSITION: Message = Message::new(
    "INVALID_STATUS_TRANSITION",
    "Invoice status change is not allowed",
    "Perubahan status tagihan tidak diizinkan",
);
