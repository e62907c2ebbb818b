use der::asn1::{AnyRef, SetOfVec, Utf8StringRef};
use time::Duration;
use time::OffsetDateTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{RdnSequence, RelativeDistinguishedName};

use crate::error::CryptoError;

/// How long a generated CA stays valid.
pub const CA_VALIDITY: Duration = Duration::days(365 * 10);

/// How far `notBefore` is back-dated to tolerate clock skew across nodes.
pub const CLOCK_SKEW_ALLOWANCE: Duration = Duration::minutes(5);

/// Subject and issuer name of a generated CA: a single `CN` attribute.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    pub common_name: String,
}

impl DistinguishedName {
    pub fn new(common_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
        }
    }

    /// Converts the distinguished name to an X.509-compatible format.
    ///
    /// The common name is stored verbatim as a UTF8String, so characters with
    /// meaning in RFC 4514 strings need no escaping.
    pub fn as_x509_name(&self) -> Result<x509_cert::name::DistinguishedName, CryptoError> {
        let common_name = Utf8StringRef::new(&self.common_name)
            .map_err(|e| CryptoError::InvalidInput(e.to_string()))?;
        let attribute = AttributeTypeAndValue {
            oid: const_oid::db::rfc4519::CN,
            value: AnyRef::from(common_name).into(),
        };
        let rdn = RelativeDistinguishedName(SetOfVec::try_from(vec![attribute])?);
        Ok(RdnSequence(vec![rdn]))
    }
}

/// Certificate validity period.
///
/// This struct represents the `notBefore` and `notAfter` fields in a certificate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// The validity window of a freshly generated CA: from five minutes before
    /// `now` until ten years after it.
    pub fn for_ca(now: OffsetDateTime) -> Self {
        Self {
            not_before: now - CLOCK_SKEW_ALLOWANCE,
            not_after: now + CA_VALIDITY,
        }
    }
}

/// Serial numbers given to generated CAs.
///
/// `Zero` reproduces the serial every existing cluster CA was issued with.
/// It is only sound while no issuer ever signs more than one certificate;
/// switch to `Random` before issuing leaves or intermediates under these CAs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SerialPolicy {
    #[default]
    Zero,
    /// A positive 128-bit random serial.
    Random,
}

impl SerialPolicy {
    /// Big-endian serial bytes, minimally encoded and positive.
    pub fn serial_number(self) -> Vec<u8> {
        match self {
            SerialPolicy::Zero => vec![0],
            SerialPolicy::Random => {
                let mut bytes: [u8; 16] = rand::random();
                // Clear the sign bit and keep the leading byte non-zero.
                bytes[0] = (bytes[0] & 0x7f) | 0x40;
                bytes.to_vec()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ca_validity_window() {
        let now = OffsetDateTime::now_utc();
        let validity = Validity::for_ca(now);
        assert_eq!(now - validity.not_before, Duration::minutes(5));
        assert_eq!(validity.not_after - now, Duration::days(3650));
    }

    #[test]
    fn test_serial_policies() {
        assert_eq!(SerialPolicy::default().serial_number(), vec![0]);

        let random = SerialPolicy::Random.serial_number();
        assert_eq!(random.len(), 16);
        assert_eq!(random[0] & 0x80, 0);
        assert_ne!(random[0], 0);
        assert_ne!(random, SerialPolicy::Random.serial_number());
    }

    #[test]
    fn test_common_name_is_not_parsed() {
        let dn = DistinguishedName::new("k3s, Inc=ops+dev");
        let name = dn.as_x509_name().unwrap();
        assert_eq!(name.0.len(), 1);

        let attributes: Vec<_> = name.0[0].0.iter().collect();
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes[0].oid, const_oid::db::rfc4519::CN);
        assert_eq!(attributes[0].value.value(), b"k3s, Inc=ops+dev");
    }
}
