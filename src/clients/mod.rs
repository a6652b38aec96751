pub mod mail;
pub mod payment;

pub use mail::{Mailer, OutgoingEmail, ResendClient};
pub use payment::{PaymentGateway, StripeClient};
