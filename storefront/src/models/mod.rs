// storefront/src/models/mod.rs

//! Row types shared by the data store, the workflows and the HTTP layer.

pub mod cart_item;
pub mod notification;
pub mod order;
pub mod payment;
pub mod payment_history;
pub mod product;
pub mod user;

pub use cart_item::CartItem;
pub use notification::{NewNotification, Notification};
pub use order::{NewOrder, Order, OrderStatus};
pub use payment::{NewPayment, Payment, PaymentStatus};
pub use payment_history::{NewPaymentHistory, PaymentHistory};
pub use product::{NewProduct, Product};
pub use user::{NewUser, User};
