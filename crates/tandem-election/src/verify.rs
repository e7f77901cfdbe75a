//! Vote signature verification against the committee schedule.

use crate::chain::{DifficultyEngine, FastchainReader, SnailchainReader};
use crate::engine::Election;
use crate::error::ElectionError;
use tandem_primitives::{recover_pubkey, CommitteeMember, ConsensusSign};
use tracing::{error, warn};

/// Finds the member whose serialized public key matches, if any.
pub fn member_by_pubkey(members: &[CommitteeMember], pubkey: &[u8]) -> Option<CommitteeMember> {
    if members.is_empty() {
        warn!("membership check against an empty committee");
        return None;
    }
    members.iter().find(|member| member.public_key.as_ref() == pubkey).cloned()
}

/// Whether the serialized public key belongs to the committee. Linear scan;
/// committees are bounded by the lottery's size cap.
pub fn is_committee_member(members: &[CommitteeMember], pubkey: &[u8]) -> bool {
    member_by_pubkey(members, pubkey).is_some()
}

impl<S, F, E> Election<S, F, E>
where
    S: SnailchainReader,
    F: FastchainReader,
    E: DifficultyEngine,
{
    /// Resolves a serialized public key against the committee for the given
    /// fast height. `Err(Committee)` when no committee covers the height;
    /// `Ok(None)` when the key is simply not a member.
    pub fn verify_public_key(
        &self,
        fast_height: u64,
        pubkey: &[u8],
    ) -> Result<Option<CommitteeMember>, ElectionError> {
        let Some(members) = self.get_committee(fast_height) else {
            error!(fast_height, "no committee for height");
            return Err(ElectionError::Committee);
        };
        Ok(member_by_pubkey(&members, pubkey))
    }

    /// Recovers the signer of a vote and checks membership at the vote's
    /// fast height.
    pub fn verify_sign(&self, sign: &ConsensusSign) -> Result<CommitteeMember, ElectionError> {
        let pubkey = recover_pubkey(&sign.hash_without_sign(), &sign.sign)
            .map_err(|_| ElectionError::InvalidSign)?;
        match self.verify_public_key(sign.fast_height, &pubkey)? {
            Some(member) => Ok(member),
            None => Err(ElectionError::InvalidMember),
        }
    }

    /// Verifies a batch of votes. Results are positional; one bad signature
    /// never short-circuits the rest.
    pub fn verify_signs(
        &self,
        signs: &[ConsensusSign],
    ) -> (Vec<Option<CommitteeMember>>, Vec<Option<ElectionError>>) {
        let mut members = Vec::with_capacity(signs.len());
        let mut errors = Vec::with_capacity(signs.len());
        for sign in signs {
            match self.verify_sign(sign) {
                Ok(member) => {
                    members.push(Some(member));
                    errors.push(None);
                }
                Err(err) => {
                    members.push(None);
                    errors.push(Some(err));
                }
            }
        }
        (members, errors)
    }
}
