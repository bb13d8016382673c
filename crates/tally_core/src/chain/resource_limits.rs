use std::{collections::BTreeSet, fmt};

use spdlog::{debug, info, trace, warn};
use tally_chainbase::UndoSession;
use tally_error::ChainError;

use crate::chain::{
    name::Name,
    resource::{
        AccountLimits, AccountResourceLimit, Limit, ResourceKind, ResourceLimits,
        ResourceLimitsConfig, ResourceLimitsState, ResourceUsage,
    },
    utils::chain_assert,
};

/// Deterministic accounting of CPU, NET and RAM.
///
/// The manager owns the configuration loaded at genesis; everything else
/// lives in the store and is read and written through the caller's
/// [`UndoSession`], so discarding a session scope discards the accounting
/// effects with it.
pub struct ResourceLimitsManager {
    config: ResourceLimitsConfig,
}

impl ResourceLimitsManager {
    /// Genesis step. Persists `config` and creates the chain state with every
    /// virtual limit at its floor.
    pub fn initialize_database(
        session: &mut UndoSession,
        config: ResourceLimitsConfig,
    ) -> Result<Self, ChainError> {
        chain_assert(
            !session.exists::<ResourceLimitsState>(0)?,
            ChainError::InvariantViolation("resource limits already initialized".to_owned()),
        )?;
        config.validate()?;

        let state = ResourceLimitsState {
            virtual_cpu_limit: config.cpu_limit_parameters.max,
            virtual_net_limit: config.net_limit_parameters.max,
            ..Default::default()
        };
        session.insert(&config)?;
        session.insert(&state)?;

        info!(
            "initialized resource limits: cpu max {} target {}, net max {} target {}",
            config.cpu_limit_parameters.max,
            config.cpu_limit_parameters.target,
            config.net_limit_parameters.max,
            config.net_limit_parameters.target
        );
        Ok(ResourceLimitsManager { config })
    }

    /// Reloads the configuration of a previously initialized store.
    pub fn open(session: &mut UndoSession) -> Result<Self, ChainError> {
        let config = session
            .find::<ResourceLimitsConfig>(0)?
            .ok_or_else(|| {
                ChainError::InvariantViolation("resource limits config not found".to_owned())
            })?;
        chain_assert(
            session.exists::<ResourceLimitsState>(0)?,
            ChainError::InvariantViolation("resource limits state not found".to_owned()),
        )?;
        Ok(ResourceLimitsManager { config })
    }

    pub fn config(&self) -> &ResourceLimitsConfig {
        &self.config
    }

    fn state(&self, session: &mut UndoSession) -> Result<ResourceLimitsState, ChainError> {
        session
            .find::<ResourceLimitsState>(0)?
            .ok_or_else(|| ChainError::InvariantViolation("resource limits state not found".to_owned()))
    }

    fn usage(&self, session: &mut UndoSession, account: &Name) -> Result<ResourceUsage, ChainError> {
        session.find::<ResourceUsage>(*account)?.ok_or_else(|| {
            ChainError::InvalidArgument(format!("account {} has no resource usage record", account))
        })
    }

    fn active_limits(
        &self,
        session: &mut UndoSession,
        account: &Name,
    ) -> Result<ResourceLimits, ChainError> {
        session
            .find::<ResourceLimits>((false, *account))?
            .ok_or_else(|| {
                ChainError::InvalidArgument(format!("account {} has no resource limits", account))
            })
    }

    /// The staged record if one exists, otherwise the active one.
    fn effective_limits(
        &self,
        session: &mut UndoSession,
        account: &Name,
    ) -> Result<ResourceLimits, ChainError> {
        match session.find::<ResourceLimits>((true, *account))? {
            Some(pending) => Ok(pending),
            None => self.active_limits(session, account),
        }
    }

    pub fn initialize_account(
        &self,
        session: &mut UndoSession,
        account: &Name,
    ) -> Result<(), ChainError> {
        chain_assert(
            !session.exists::<ResourceLimits>((false, *account))?,
            ChainError::InvalidArgument(format!(
                "resource limits for account {} already initialized",
                account
            )),
        )?;
        session.insert(&ResourceLimits {
            owner: *account,
            ..Default::default()
        })?;
        session.insert(&ResourceUsage::new(*account))?;
        debug!("initialized resource limits for account {}", account);
        Ok(())
    }

    /// Stages new limits for `account`. They become active on the next
    /// [`commit_pending_limit_changes`](Self::commit_pending_limit_changes),
    /// except that synchronizing RAM already checks against the staged value.
    ///
    /// Returns whether any limit is lower than the one it replaces.
    pub fn set_account_limits(
        &self,
        session: &mut UndoSession,
        account: &Name,
        ram_bytes: Limit,
        net_weight: Limit,
        cpu_weight: Limit,
    ) -> Result<bool, ChainError> {
        if let Limit::Bounded(limit) = ram_bytes {
            let usage = self.usage(session, account)?;
            chain_assert(
                limit >= usage.ram_usage,
                ChainError::RamLimitUnderflow {
                    account: account.to_string(),
                    limit,
                    usage: usage.ram_usage,
                },
            )?;
        }

        let active = self.active_limits(session, account)?;
        let staged = session.find::<ResourceLimits>((true, *account))?;
        let current = staged.as_ref().unwrap_or(&active);
        let decreased = current.ram_bytes.is_decreased_by(&ram_bytes)
            || current.net_weight.is_decreased_by(&net_weight)
            || current.cpu_weight.is_decreased_by(&cpu_weight);

        match staged {
            Some(mut pending) => session.modify(&mut pending, |limits| {
                limits.ram_bytes = ram_bytes;
                limits.net_weight = net_weight;
                limits.cpu_weight = cpu_weight;
            })?,
            None => session.insert(&ResourceLimits::new(
                *account, true, net_weight, cpu_weight, ram_bytes,
            ))?,
        }

        debug!(
            "staged limits for {}: ram {}, net {}, cpu {}",
            account, ram_bytes, net_weight, cpu_weight
        );
        Ok(decreased)
    }

    pub fn get_account_limits(
        &self,
        session: &mut UndoSession,
        account: &Name,
    ) -> Result<AccountLimits, ChainError> {
        Ok(AccountLimits::from(&self.effective_limits(session, account)?))
    }

    /// Folds every staged limit change into the active records and the
    /// chain-wide totals.
    pub fn commit_pending_limit_changes(&self, session: &mut UndoSession) -> Result<(), ChainError> {
        let (lower, upper) = ResourceLimits::pending_key_range();
        let staged = session.find_range::<ResourceLimits>(lower, upper)?;
        if staged.is_empty() {
            return Ok(());
        }

        let mut state = self.state(session)?;
        let mut next = state.clone();

        for pending in staged.iter() {
            let mut active = self.active_limits(session, &pending.owner)?;
            for kind in ResourceKind::ALL {
                let total = next.total_weight_mut(kind);
                *total = update_total(*total, active.weight(kind), pending.weight(kind), kind)?;
            }
            next.total_ram_bytes =
                update_total(next.total_ram_bytes, active.ram_bytes, pending.ram_bytes, "ram")?;

            session.modify(&mut active, |limits| {
                limits.ram_bytes = pending.ram_bytes;
                limits.net_weight = pending.net_weight;
                limits.cpu_weight = pending.cpu_weight;
            })?;
            session.remove(pending)?;
        }

        info!(
            "committed {} limit changes: total cpu weight {}, total net weight {}, total ram bytes {}",
            staged.len(),
            next.total_cpu_weight,
            next.total_net_weight,
            next.total_ram_bytes
        );
        session.modify(&mut state, |state| *state = next)?;
        Ok(())
    }

    /// Charges one transaction's CPU and NET to every account in `accounts`
    /// and to the pending block totals.
    ///
    /// Runs in its own scope of `session`: either every charge lands or none
    /// does.
    pub fn charge_transaction_usage(
        &self,
        session: &mut UndoSession,
        accounts: &BTreeSet<Name>,
        cpu_usage: u64,
        net_usage: u64,
        slot: u32,
    ) -> Result<(), ChainError> {
        let scope = session.begin_scope();
        match self.apply_transaction_usage(session, accounts, cpu_usage, net_usage, slot) {
            Ok(()) => {
                session.squash(scope)?;
                Ok(())
            }
            Err(e) => {
                debug!("transaction usage rejected at slot {}: {}", slot, e);
                if let Err(undo_error) = session.undo(scope) {
                    warn!(
                        "failed to discard rejected transaction usage ({}): {}",
                        e, undo_error
                    );
                    return Err(undo_error.into());
                }
                Err(e)
            }
        }
    }

    fn apply_transaction_usage(
        &self,
        session: &mut UndoSession,
        accounts: &BTreeSet<Name>,
        cpu_usage: u64,
        net_usage: u64,
        slot: u32,
    ) -> Result<(), ChainError> {
        let mut state = self.state(session)?;
        let charges = [(ResourceKind::Cpu, cpu_usage), (ResourceKind::Net, net_usage)];

        for account in accounts {
            let mut usage = self.usage(session, account)?;
            let limits = self.active_limits(session, account)?;

            let mut next = usage.clone();
            for (kind, units) in charges {
                let accumulator = next.usage_mut(kind);
                accumulator.add(units, slot, self.config.account_usage_average_window(kind))?;
                if let Limit::Bounded(limit) = self.capacity(&state, &limits, kind)? {
                    chain_assert(
                        accumulator.consumed <= limit,
                        ChainError::TxResourceExhausted {
                            account: account.to_string(),
                            resource: kind.to_string(),
                            used: accumulator.consumed,
                            limit,
                        },
                    )?;
                }
            }

            session.modify(&mut usage, |usage| *usage = next)?;
            trace!(
                "charged {} cpu and {} net to {} at slot {}",
                cpu_usage, net_usage, account, slot
            );
        }

        let mut next = state.clone();
        for (kind, units) in charges {
            let max = self.config.limit_parameters(kind).max;
            let pending = next.pending_usage_mut(kind);
            let total = pending.checked_add(units).ok_or_else(|| {
                ChainError::InvalidArgument(format!("overflow in pending block {} usage", kind))
            })?;
            chain_assert(
                total <= max,
                ChainError::BlockResourceExhausted {
                    resource: kind.to_string(),
                    pending: total,
                    max,
                },
            )?;
            *pending = total;
        }

        session.modify(&mut state, |state| *state = next)?;
        Ok(())
    }

    /// Stages a RAM delta for `account`. No limit is checked until
    /// [`synchronize_account_ram_usage`](Self::synchronize_account_ram_usage).
    pub fn add_pending_ram_usage(
        &self,
        session: &mut UndoSession,
        account: &Name,
        ram_delta: i64,
    ) -> Result<(), ChainError> {
        if ram_delta == 0 {
            return Ok(());
        }
        let mut usage = self.usage(session, account)?;
        let pending = usage.pending_ram_delta.checked_add(ram_delta).ok_or_else(|| {
            ChainError::InvalidArgument(format!(
                "overflow in pending ram delta for account {}",
                account
            ))
        })?;
        session.modify(&mut usage, |usage| usage.pending_ram_delta = pending)?;
        Ok(())
    }

    /// Commits the staged RAM delta and enforces the RAM quota.
    ///
    /// The commit is not reverted on failure; callers discard the enclosing
    /// scope instead.
    pub fn synchronize_account_ram_usage(
        &self,
        session: &mut UndoSession,
        account: &Name,
    ) -> Result<(), ChainError> {
        let mut usage = self.usage(session, account)?;
        let delta = usage.pending_ram_delta;
        let ram_usage = if delta >= 0 {
            usage.ram_usage.checked_add(delta as u64).ok_or_else(|| {
                ChainError::InvalidArgument(format!("overflow in ram usage for account {}", account))
            })?
        } else {
            usage
                .ram_usage
                .checked_sub(delta.unsigned_abs())
                .ok_or_else(|| {
                    ChainError::InvariantViolation(format!(
                        "ram usage of account {} would drop below zero",
                        account
                    ))
                })?
        };
        session.modify(&mut usage, |usage| {
            usage.ram_usage = ram_usage;
            usage.pending_ram_delta = 0;
        })?;

        let limit = self.effective_limits(session, account)?.ram_bytes;
        if let Limit::Bounded(limit) = limit {
            chain_assert(
                ram_usage <= limit,
                ChainError::TxResourceExhausted {
                    account: account.to_string(),
                    resource: "ram".to_owned(),
                    used: ram_usage,
                    limit,
                },
            )?;
        }
        Ok(())
    }

    pub fn get_account_ram_usage(
        &self,
        session: &mut UndoSession,
        account: &Name,
    ) -> Result<u64, ChainError> {
        Ok(self.usage(session, account)?.ram_usage)
    }

    /// Closes the pending block: feeds its totals into the block averages,
    /// moves both virtual limits and clears the pending usage.
    pub fn finalize_block(&self, session: &mut UndoSession, slot: u32) -> Result<(), ChainError> {
        let mut state = self.state(session)?;
        let mut next = state.clone();

        for kind in ResourceKind::ALL {
            let params = self.config.limit_parameters(kind);
            let block_usage = next.pending_usage(kind);
            let (average, virtual_limit) = next.elastic_mut(kind);
            let was_congested = params.is_congested(average.average());
            *virtual_limit = params.advance(average, *virtual_limit, block_usage, slot)?;

            let congested = params.is_congested(average.average());
            if congested && !was_congested {
                warn!(
                    "{} congested at slot {}: average {} reached target {}",
                    kind,
                    slot,
                    average.average(),
                    params.target
                );
            } else if was_congested && !congested {
                info!(
                    "{} relaxed at slot {}: average {} below target {}",
                    kind,
                    slot,
                    average.average(),
                    params.target
                );
            }
            *next.pending_usage_mut(kind) = 0;
        }

        debug!(
            "finalized block at slot {}: virtual cpu {}, virtual net {}",
            slot, next.virtual_cpu_limit, next.virtual_net_limit
        );
        session.modify(&mut state, |state| *state = next)?;
        Ok(())
    }

    fn capacity(
        &self,
        state: &ResourceLimitsState,
        limits: &ResourceLimits,
        kind: ResourceKind,
    ) -> Result<Limit, ChainError> {
        let weight = match limits.weight(kind) {
            Limit::Unbounded => return Ok(Limit::Unbounded),
            Limit::Bounded(weight) => weight,
        };
        let virtual_limit = state.virtual_limit(kind);
        let total_weight = state.total_weight(kind);
        if total_weight == 0 {
            return Ok(Limit::Bounded(virtual_limit));
        }
        let capacity = virtual_limit as u128 * weight as u128 / total_weight as u128;
        u64::try_from(capacity).map(Limit::Bounded).map_err(|_| {
            ChainError::InvariantViolation(format!(
                "{} weight {} of account {} exceeds total weight {}",
                kind, weight, limits.owner, total_weight
            ))
        })
    }

    /// Current entitlement of `account`, from its committed weight.
    pub fn account_limit(
        &self,
        session: &mut UndoSession,
        kind: ResourceKind,
        account: &Name,
    ) -> Result<Limit, ChainError> {
        let state = self.state(session)?;
        let limits = self.active_limits(session, account)?;
        self.capacity(&state, &limits, kind)
    }

    pub fn account_limit_ex(
        &self,
        session: &mut UndoSession,
        kind: ResourceKind,
        account: &Name,
    ) -> Result<AccountResourceLimit, ChainError> {
        let state = self.state(session)?;
        let limits = self.active_limits(session, account)?;
        let usage = self.usage(session, account)?;
        let max = self.capacity(&state, &limits, kind)?;
        let accumulator = usage.usage(kind);
        let available = match max {
            Limit::Unbounded => Limit::Unbounded,
            Limit::Bounded(max) => Limit::Bounded(max.saturating_sub(accumulator.consumed)),
        };
        Ok(AccountResourceLimit {
            used: accumulator.consumed,
            available,
            max,
            last_usage_update_slot: accumulator.last_ordinal,
        })
    }

    pub fn virtual_limit(
        &self,
        session: &mut UndoSession,
        kind: ResourceKind,
    ) -> Result<u64, ChainError> {
        Ok(self.state(session)?.virtual_limit(kind))
    }

    pub fn total_weight(
        &self,
        session: &mut UndoSession,
        kind: ResourceKind,
    ) -> Result<u64, ChainError> {
        Ok(self.state(session)?.total_weight(kind))
    }

    pub fn total_ram_bytes(&self, session: &mut UndoSession) -> Result<u64, ChainError> {
        Ok(self.state(session)?.total_ram_bytes)
    }

    pub fn pending_block_usage(
        &self,
        session: &mut UndoSession,
        kind: ResourceKind,
    ) -> Result<u64, ChainError> {
        Ok(self.state(session)?.pending_usage(kind))
    }

    pub fn average_block_usage(
        &self,
        session: &mut UndoSession,
        kind: ResourceKind,
    ) -> Result<u64, ChainError> {
        Ok(self.state(session)?.average_block_usage(kind).average())
    }
}

// total - old + new, counting only bounded values
fn update_total(
    total: u64,
    old: Limit,
    new: Limit,
    what: impl fmt::Display,
) -> Result<u64, ChainError> {
    total
        .checked_sub(old.weight())
        .ok_or_else(|| ChainError::InvariantViolation(format!("total {} underflow", what)))?
        .checked_add(new.weight())
        .ok_or_else(|| ChainError::InvalidArgument(format!("total {} overflow", what)))
}
