use std::fmt;

use uuid::Uuid;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub Uuid);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

id_type!(CaseId);
id_type!(UserId);
id_type!(TeamId);
id_type!(QueueId);

/// The record an incoming case is being assigned to.
/// Only `Team` triggers resolution; assigning directly to a user is left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignee {
    User(UserId),
    Team(TeamId),
}

/// Terminal outcome of a resolution. `Skipped` means the assignee was already
/// a user and nothing was done; it is a valid outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    AssignedToUser(UserId),
    AssignedToQueue(QueueId),
    Skipped,
}
