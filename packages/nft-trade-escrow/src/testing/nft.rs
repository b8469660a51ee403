//! In-memory NFT registry with ERC-721 ownership and approval rules

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::CustodyError;
use crate::interfaces::AssetCustodian;
use crate::types::{Address, AssetRef};

#[derive(Debug, Clone)]
struct Token {
    owner: Address,
    approved: Option<Address>,
}

#[derive(Debug, Default)]
struct RegistryState {
    tokens: HashMap<AssetRef, Token>,
    next_token_id: HashMap<Address, u128>,
    /// (owner, operator) pairs approved for all of the owner's tokens
    operators: HashSet<(Address, Address)>,
    fail_next_transfer: Option<String>,
}

/// Every NFT collection on one chain
#[derive(Debug, Default)]
pub struct InMemoryNftRegistry {
    state: Mutex<RegistryState>,
}

impl InMemoryNftRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mint the next token of `collection` to `to`; IDs start at 0
    pub fn mint(&self, collection: Address, to: Address) -> Result<AssetRef, CustodyError> {
        let mut state = self.lock();
        let token_id = state.next_token_id.get(&collection).copied().unwrap_or(0);
        let asset = AssetRef::new(collection, token_id);
        if to.is_zero() {
            return Err(CustodyError::InvalidRecipient { asset });
        }

        state.next_token_id.insert(collection, token_id + 1);
        state.tokens.insert(
            asset,
            Token {
                owner: to,
                approved: None,
            },
        );
        Ok(asset)
    }

    /// Approve `operator` for a single token; `caller` must own it or be an
    /// operator of the owner
    pub fn approve(
        &self,
        caller: &Address,
        asset: &AssetRef,
        operator: &Address,
    ) -> Result<(), CustodyError> {
        let mut state = self.lock();
        let owner = state
            .tokens
            .get(asset)
            .map(|t| t.owner)
            .ok_or(CustodyError::UnknownAsset(*asset))?;
        if *caller != owner && !state.operators.contains(&(owner, *caller)) {
            return Err(CustodyError::NotAuthorized {
                asset: *asset,
                operator: *caller,
            });
        }
        if let Some(token) = state.tokens.get_mut(asset) {
            token.approved = (!operator.is_zero()).then_some(*operator);
        }
        Ok(())
    }

    pub fn set_approval_for_all(&self, owner: &Address, operator: &Address, approved: bool) {
        let mut state = self.lock();
        if approved {
            state.operators.insert((*owner, *operator));
        } else {
            state.operators.remove(&(*owner, *operator));
        }
    }

    /// Make the next `transfer_from` fail with `Rejected(reason)`
    pub fn fail_next_transfer(&self, reason: impl Into<String>) {
        self.lock().fail_next_transfer = Some(reason.into());
    }

    /// Number of tokens `owner` holds across all collections
    pub fn balance_of(&self, owner: &Address) -> usize {
        self.lock()
            .tokens
            .values()
            .filter(|t| t.owner == *owner)
            .count()
    }
}

impl AssetCustodian for InMemoryNftRegistry {
    fn owner_of(&self, asset: &AssetRef) -> Result<Address, CustodyError> {
        self.lock()
            .tokens
            .get(asset)
            .map(|t| t.owner)
            .ok_or(CustodyError::UnknownAsset(*asset))
    }

    fn is_approved(&self, asset: &AssetRef, operator: &Address) -> Result<bool, CustodyError> {
        let state = self.lock();
        let token = state
            .tokens
            .get(asset)
            .ok_or(CustodyError::UnknownAsset(*asset))?;
        Ok(token.approved == Some(*operator) || state.operators.contains(&(token.owner, *operator)))
    }

    fn transfer_from(
        &self,
        operator: &Address,
        asset: &AssetRef,
        from: &Address,
        to: &Address,
    ) -> Result<(), CustodyError> {
        let mut state = self.lock();
        if let Some(reason) = state.fail_next_transfer.take() {
            return Err(CustodyError::Rejected {
                asset: *asset,
                reason,
            });
        }
        let token = state
            .tokens
            .get(asset)
            .cloned()
            .ok_or(CustodyError::UnknownAsset(*asset))?;

        if token.owner != *from {
            return Err(CustodyError::NotOwner {
                asset: *asset,
                from: *from,
            });
        }
        let authorized = *operator == token.owner
            || token.approved == Some(*operator)
            || state.operators.contains(&(token.owner, *operator));
        if !authorized {
            return Err(CustodyError::NotAuthorized {
                asset: *asset,
                operator: *operator,
            });
        }
        if to.is_zero() {
            return Err(CustodyError::InvalidRecipient { asset: *asset });
        }

        state.tokens.insert(
            *asset,
            Token {
                owner: *to,
                approved: None,
            },
        );
        Ok(())
    }
}
