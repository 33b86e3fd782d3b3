//! Status enums mapping to SMALLINT lookup tables.
//!
//! Each variant's discriminant matches the seed data order (1-based) in the
//! corresponding `*_statuses` table. Callers see the upper-case name.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Resolve a database status ID, or `None` for an unknown ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some(Self::$variant), )+
                    _ => None,
                }
            }

            /// Upper-case name as stored in the lookup table.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $label, )+
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

define_status_enum! {
    /// Occupancy of one seat for one showtime.
    TicketStatus {
        Available = 1 => "AVAILABLE",
        Booked = 2 => "BOOKED",
        Sold = 3 => "SOLD",
        Cancelled = 4 => "CANCELLED",
    }
}

define_status_enum! {
    /// Order lifecycle status.
    OrderStatus {
        Processing = 1 => "PROCESSING",
        Completed = 2 => "COMPLETED",
        Cancelled = 3 => "CANCELLED",
        Refunded = 4 => "REFUNDED",
    }
}

define_status_enum! {
    /// Payment transaction status.
    PaymentStatus {
        Pending = 1 => "PENDING",
        Success = 2 => "SUCCESS",
        Failed = 3 => "FAILED",
    }
}

impl TicketStatus {
    /// `true` while the seat is held by an order.
    pub fn is_occupied(self) -> bool {
        matches!(self, TicketStatus::Booked | TicketStatus::Sold)
    }
}

impl OrderStatus {
    /// Cancelled and refunded orders never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Refunded)
    }
}
