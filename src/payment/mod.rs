//! Bridge between the storefront and the external payment gateway.

mod bridge;
mod gateway;
mod landing;
mod models;
mod status;

pub use bridge::{classify_sources, Classification, PaymentBridge, StatusSource};
pub use gateway::{GatewayError, HttpPaymentGateway, PaymentGateway};
pub use landing::LandingPage;
pub use models::{CreatedPayment, GatewayReply, PaymentIntent};
pub use status::{classify, extract_status, StatusBucket, StatusFields, STATUS_KEYS};
