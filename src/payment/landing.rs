use super::status::StatusBucket;

const SUCCESS_PAGE: &str = include_str!("pages/success.html");
const FAILED_PAGE: &str = include_str!("pages/failed.html");
const CANCELLED_PAGE: &str = include_str!("pages/cancelled.html");

/// Browser page shown once the gateway hands the user back to us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandingPage {
    Success,
    Failed,
    Cancelled,
}

impl LandingPage {
    /// Unknown statuses land on the cancelled page, never on success.
    pub fn for_bucket(bucket: StatusBucket) -> Self {
        match bucket {
            StatusBucket::Success => LandingPage::Success,
            StatusBucket::Failure => LandingPage::Failed,
            StatusBucket::Unknown => LandingPage::Cancelled,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            LandingPage::Success => "/payment/success",
            LandingPage::Failed => "/payment/failed",
            LandingPage::Cancelled => "/payment/cancelled",
        }
    }

    /// Page path, carrying the order id along when the gateway sent one.
    pub fn location(&self, order_id: Option<&str>) -> String {
        match order_id {
            Some(order_id) => format!(
                "{}?order_id={}",
                self.path(),
                urlencoding::encode(order_id)
            ),
            None => self.path().to_string(),
        }
    }

    pub fn html(&self) -> &'static str {
        match self {
            LandingPage::Success => SUCCESS_PAGE,
            LandingPage::Failed => FAILED_PAGE,
            LandingPage::Cancelled => CANCELLED_PAGE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_lands_on_cancelled() {
        assert_eq!(
            LandingPage::for_bucket(StatusBucket::Unknown),
            LandingPage::Cancelled
        );
        assert_eq!(
            LandingPage::for_bucket(StatusBucket::Failure).path(),
            "/payment/failed"
        );
    }

    #[test]
    fn location_encodes_order_id() {
        assert_eq!(
            LandingPage::Success.location(Some("ORD 1&x")),
            "/payment/success?order_id=ORD%201%26x"
        );
        assert_eq!(LandingPage::Cancelled.location(None), "/payment/cancelled");
    }

    #[test]
    fn pages_post_same_origin_messages() {
        for (page, message) in [
            (LandingPage::Success, "PAYMENT_SUCCESS"),
            (LandingPage::Failed, "PAYMENT_FAILED"),
            (LandingPage::Cancelled, "PAYMENT_CANCELLED"),
        ] {
            let html = page.html();
            assert!(html.contains(message));
            assert!(html.contains("window.location.origin"));
            assert!(!html.contains("'*'"));
        }
        assert!(LandingPage::Failed.html().contains("PAYMENT_RETRY"));
    }
}
