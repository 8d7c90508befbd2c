use uuid::Uuid;

/// Whether `viewer` may see and use the delete control on a record owned by
/// `owner`. Anonymous viewers never can.
pub fn can_delete(viewer: Option<Uuid>, owner: Uuid) -> bool {
    viewer == Some(owner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    NotOwner,
}

impl DeleteOutcome {
    /// Decides a delete from the owner looked up beforehand.
    pub fn precheck(owner: Option<Uuid>, requester: Uuid) -> Option<Self> {
        match owner {
            None => Some(Self::NotFound),
            Some(owner) if !can_delete(Some(requester), owner) => Some(Self::NotOwner),
            Some(_) => None,
        }
    }
}
