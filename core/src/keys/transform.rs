//! keys/transform.rs
//! Transform keys from a group private key to member public keys.
//!
//! Adding members to a group publishes one transform key per member; the
//! directory uses it to re-encrypt group access keys for that member without
//! learning the seed.

use crate::keys::capability::{
    AsymmetricReencryption, Directory, DirectoryError, PrincipalId, PrivateKey, SigningKeys, TransformKey,
};
use crate::types::SdkError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberTransformKey {
    pub member: PrincipalId,
    pub transform_key: TransformKey,
}

/// Look up each member's public key and derive a transform key to it.
///
/// Fails on the first member without a published key; nothing is returned
/// for the others in that case.
pub fn member_transform_keys<C, D>(
    recrypt: &C,
    directory: &D,
    group_private_key: &PrivateKey,
    member_ids: &[String],
    signing_keys: &SigningKeys,
) -> Result<Vec<MemberTransformKey>, SdkError>
where
    C: AsymmetricReencryption + ?Sized,
    D: Directory + ?Sized,
{
    if member_ids.is_empty() {
        return Ok(Vec::new());
    }

    let members: Vec<PrincipalId> = member_ids.iter().map(PrincipalId::user).collect();
    let public_keys = directory.lookup_public_keys(&members)?;

    let mut out = Vec::with_capacity(members.len());
    for member in members {
        let public_key = public_keys
            .get(&member)
            .ok_or_else(|| DirectoryError::KeyNotFound(member.clone()))?;
        let transform_key = recrypt.generate_transform_key(group_private_key, public_key, signing_keys)?;
        out.push(MemberTransformKey { member, transform_key });
    }

    tracing::debug!(members = out.len(), "generated member transform keys");
    Ok(out)
}
