//! Status helper enums mapping to SMALLSERIAL lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` database table. Over the wire a status
//! is always its lowercase name, never the numeric id.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Return the seed-data name.
            pub fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => $label ),+
                }
            }

            /// Map a database status ID back to the enum.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( x if x == $val => Some(Self::$variant), )+
                    _ => None,
                }
            }

            /// Parse a seed-data name.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( $label => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.name())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Self::from_name(&raw).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        "unknown {} '{raw}'",
                        stringify!($name)
                    ))
                })
            }
        }
    };
}

define_status_enum! {
    /// Supplier submission lifecycle status.
    SupplierStatus {
        Draft = 1 => "draft",
        Submitted = 2 => "submitted",
        Approved = 3 => "approved",
        Rejected = 4 => "rejected",
    }
}

define_status_enum! {
    /// Generation job execution status.
    JobStatus {
        Pending = 1 => "pending",
        Running = 2 => "running",
        Done = 3 => "done",
        Failed = 4 => "failed",
    }
}

define_status_enum! {
    /// One-time invite code status.
    InviteCodeStatus {
        Active = 1 => "active",
        Exhausted = 2 => "exhausted",
        Revoked = 3 => "revoked",
    }
}

impl JobStatus {
    /// `done` and `failed` never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Statuses the duplicate engine may mutate.
pub const RESOLVABLE_SUPPLIER_STATUSES: [SupplierStatus; 2] =
    [SupplierStatus::Submitted, SupplierStatus::Approved];

/// Statuses shown by the read-only duplicate listing.
pub const LISTED_SUPPLIER_STATUSES: [SupplierStatus; 3] = [
    SupplierStatus::Submitted,
    SupplierStatus::Approved,
    SupplierStatus::Rejected,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supplier_status_ids_match_seed_data() {
        assert_eq!(SupplierStatus::Draft.id(), 1);
        assert_eq!(SupplierStatus::Submitted.id(), 2);
        assert_eq!(SupplierStatus::Approved.id(), 3);
        assert_eq!(SupplierStatus::Rejected.id(), 4);
    }

    #[test]
    fn job_status_ids_match_seed_data() {
        assert_eq!(JobStatus::Pending.id(), 1);
        assert_eq!(JobStatus::Running.id(), 2);
        assert_eq!(JobStatus::Done.id(), 3);
        assert_eq!(JobStatus::Failed.id(), 4);
    }

    #[test]
    fn status_into_status_id() {
        let id: StatusId = InviteCodeStatus::Exhausted.into();
        assert_eq!(id, 2);
    }

    #[test]
    fn from_id_round_trips_and_rejects_unknown() {
        assert_eq!(JobStatus::from_id(3), Some(JobStatus::Done));
        assert_eq!(JobStatus::from_id(9), None);
    }

    #[test]
    fn only_done_and_failed_are_terminal() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn serializes_as_name() {
        let json = serde_json::to_value(SupplierStatus::Rejected).unwrap();
        assert_eq!(json, "rejected");
        let parsed: JobStatus = serde_json::from_value(serde_json::json!("running")).unwrap();
        assert_eq!(parsed, JobStatus::Running);
        assert!(serde_json::from_value::<JobStatus>(serde_json::json!("queued")).is_err());
    }
}
