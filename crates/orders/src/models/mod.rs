//! Domain and persistence types for the order aggregate.

pub mod address;
pub mod order;

pub use address::{AddressField, AddressFields, AddressProbe, NewAddress, OrderAddress};
pub use order::{
    NewOrder, Order, OrderChanges, OrderDraft, OrderIdentifiers, OrderItem, OrderItemDraft,
    OrderRecord, OrderView, changed_fields,
};
