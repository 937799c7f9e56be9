use kernel::id::Id;

pub use kernel::id::markers::Principal as PrincipalMarker;

/// Stable internal identifier of a principal (UUID v4).
///
/// This is the single subject convention of the token contract: every
/// token's `sub` claim is this ID rendered as a string.
pub type PrincipalId = Id<PrincipalMarker>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_id_new() {
        let id = PrincipalId::new();
        assert_eq!(id.as_uuid().get_version_num(), 4); // UUIDv4
    }

    #[test]
    fn test_subject_roundtrip() {
        // sub claim is the hyphenated UUID string
        let id = PrincipalId::new();
        let sub = id.to_string();
        assert_eq!(PrincipalId::parse_str(&sub).unwrap(), id);
    }
}
