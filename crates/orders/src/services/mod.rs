//! Order workflow services.

pub mod address;
pub mod invoice;
pub mod orders;

pub use address::AddressDeduplicator;
pub use invoice::InvoiceNumberGenerator;
pub use orders::OrderService;
