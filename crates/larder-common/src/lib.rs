//! Shared identifier types used across larder crates.
//!
//! Every entity in the tracker (stores, equipment, readings, records, actions,
//! notifications, audit entries, users) is keyed by a UUID. Wrapping each in its
//! own type keeps an `EquipmentId` from being passed where a `StoreId` is expected.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid id: {0}")]
    InvalidId(String),
}

pub mod ids {
    // Strongly typed IDs to avoid mixing entity kinds at compile time.
    use super::{Error, Result};
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use std::str::FromStr;
    use uuid::Uuid;

    macro_rules! id_type {
        ($name:ident) => {
            #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(Uuid);

            impl $name {
                // Generate a new random ID for this entity kind.
                pub fn new() -> Self {
                    Self(Uuid::new_v4())
                }

                // Wrap an existing UUID when decoding from storage.
                pub fn from_uuid(uuid: Uuid) -> Self {
                    Self(uuid)
                }

                pub fn as_uuid(&self) -> Uuid {
                    self.0
                }
            }

            impl Default for $name {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl FromStr for $name {
                type Err = Error;

                fn from_str(input: &str) -> Result<Self> {
                    // Preserve the original input for clearer error messages.
                    let uuid =
                        Uuid::parse_str(input.trim()).map_err(|_| Error::InvalidId(input.into()))?;
                    Ok(Self(uuid))
                }
            }

            impl From<Uuid> for $name {
                fn from(uuid: Uuid) -> Self {
                    Self(uuid)
                }
            }
        };
    }

    id_type!(StoreId);
    id_type!(UserId);
    id_type!(EquipmentId);
    id_type!(TemperatureRecordId);
    id_type!(ComplianceRecordId);
    id_type!(CorrectiveActionId);
    id_type!(NotificationId);
    id_type!(AuditEntryId);
}
