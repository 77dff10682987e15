//! Download-link lifecycle: issuance, redemption and resending.

mod error;
mod issuer;
mod links;
mod redemption;
mod resend;
#[cfg(test)]
pub(crate) mod testing;
mod token;

pub use error::DownloadError;
pub use issuer::{IssueRequest, IssuedLink, LinkIssuer};
pub use links::DownloadLinks;
pub use redemption::{RedeemedFile, RedemptionHandler};
pub use resend::{
    LinkResender, ResendDenied, ResendOutcome, ResendRequest, ResendThrottle, MAX_RESENDS,
    RESEND_COOLDOWN_SECS,
};
pub use token::{generate_token, looks_like_token, TOKEN_LENGTH};
