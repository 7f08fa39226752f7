//! Payment-gateway boundary.
//!
//! Order creation and the hosted checkout flow live entirely with the
//! external gateway; the only part of the handshake this service touches is
//! the signed receipt posted back after a payment, and the only question it
//! answers is "was this receipt signed with our shared secret". Verification
//! happens before anything touches the ledger.

use crate::error::LedgerError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The signed confirmation a gateway posts back after a payment.
#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub payment_id: String,
    pub order_id: String,
    /// Hex-encoded HMAC-SHA256 over `"{order_id}|{payment_id}"`.
    pub signature: String,
}

pub trait PaymentGateway: Send + Sync {
    fn verify_payment(&self, receipt: &PaymentReceipt) -> Result<(), LedgerError>;
}

/// Verifies receipt signatures against the shared secret configured for the
/// gateway account.
pub struct SharedSecretGateway {
    key_secret: String,
}

impl SharedSecretGateway {
    pub fn new(key_secret: String) -> Self {
        Self { key_secret }
    }
}

impl PaymentGateway for SharedSecretGateway {
    fn verify_payment(&self, receipt: &PaymentReceipt) -> Result<(), LedgerError> {
        if receipt.payment_id.is_empty() || receipt.order_id.is_empty() {
            return Err(LedgerError::PaymentError(
                "receipt is missing payment_id or order_id".to_string(),
            ));
        }

        let claimed = hex::decode(&receipt.signature)
            .map_err(|_| LedgerError::PaymentError("signature is not valid hex".to_string()))?;

        let mut mac = HmacSha256::new_from_slice(self.key_secret.as_bytes())
            .map_err(|_| LedgerError::PaymentError("invalid gateway secret".to_string()))?;
        mac.update(receipt.order_id.as_bytes());
        mac.update(b"|");
        mac.update(receipt.payment_id.as_bytes());

        // verify_slice compares in constant time.
        mac.verify_slice(&claimed)
            .map_err(|_| LedgerError::PaymentError("signature verification failed".to_string()))
    }
}

/// Accepts any well-formed receipt. Only reachable when the config's
/// `gateway.dev_mode` flag is set.
pub struct DevGateway;

impl PaymentGateway for DevGateway {
    fn verify_payment(&self, receipt: &PaymentReceipt) -> Result<(), LedgerError> {
        if receipt.payment_id.is_empty() {
            return Err(LedgerError::PaymentError(
                "receipt is missing payment_id".to_string(),
            ));
        }
        tracing::warn!(
            payment_id = %receipt.payment_id,
            "accepting receipt without signature verification (dev gateway)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, order_id: &str, payment_id: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signature_verifies() {
        let gateway = SharedSecretGateway::new("test_secret".to_string());
        let receipt = PaymentReceipt {
            payment_id: "pay_1".to_string(),
            order_id: "order_1".to_string(),
            signature: sign("test_secret", "order_1", "pay_1"),
        };
        assert!(gateway.verify_payment(&receipt).is_ok());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let gateway = SharedSecretGateway::new("test_secret".to_string());
        let receipt = PaymentReceipt {
            payment_id: "pay_1".to_string(),
            order_id: "order_1".to_string(),
            signature: sign("other_secret", "order_1", "pay_1"),
        };
        let err = gateway.verify_payment(&receipt).unwrap_err();
        assert!(err.to_string().contains("signature verification failed"));
    }

    #[test]
    fn tampered_receipt_is_rejected() {
        let gateway = SharedSecretGateway::new("test_secret".to_string());
        let receipt = PaymentReceipt {
            payment_id: "pay_2".to_string(), // signed for pay_1
            order_id: "order_1".to_string(),
            signature: sign("test_secret", "order_1", "pay_1"),
        };
        assert!(gateway.verify_payment(&receipt).is_err());
    }

    #[test]
    fn malformed_hex_is_rejected_before_comparison() {
        let gateway = SharedSecretGateway::new("test_secret".to_string());
        let receipt = PaymentReceipt {
            payment_id: "pay_1".to_string(),
            order_id: "order_1".to_string(),
            signature: "not-hex".to_string(),
        };
        let err = gateway.verify_payment(&receipt).unwrap_err();
        assert!(err.to_string().contains("not valid hex"));
    }

    #[test]
    fn dev_gateway_accepts_but_requires_payment_id() {
        let gateway = DevGateway;
        assert!(gateway
            .verify_payment(&PaymentReceipt {
                payment_id: "pay_1".to_string(),
                order_id: String::new(),
                signature: String::new(),
            })
            .is_ok());
        assert!(gateway
            .verify_payment(&PaymentReceipt {
                payment_id: String::new(),
                order_id: String::new(),
                signature: String::new(),
            })
            .is_err());
    }
}
