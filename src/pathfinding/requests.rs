//! Asynchronous path requests.
//!
//! A request returns a [`PathTicket`] immediately. Searches are advanced a bounded
//! number of expansions per tick and each result is published once as a
//! [`PathResolved`] message. Delivery has no effect on the engine; callers that no
//! longer care either cancel the ticket or ignore the message.

use bevy::prelude::*;
use std::collections::VecDeque;

use super::{CostPolicy, PathOptions, PathSearch, SearchStatus};
use crate::config::WorldConfig;
use crate::constants::PATH_BUDGET_PER_TICK;
use crate::map::grid::TileGrid;
use crate::map::islands::IslandTracker;
use crate::map::tile_pos::TilePos;
use crate::messages::PathResolved;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathTicket(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathRequest {
    pub start: TilePos,
    pub goal: TilePos,
    pub policy: CostPolicy,
    pub options: PathOptions,
}

impl PathRequest {
    pub fn new(start: TilePos, goal: TilePos) -> Self {
        Self {
            start,
            goal,
            policy: CostPolicy::default(),
            options: PathOptions::default(),
        }
    }

    pub fn with_policy(mut self, policy: CostPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_options(mut self, options: PathOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Resource, Debug)]
pub struct PathRequests {
    next_ticket: u64,
    pending: VecDeque<(PathTicket, PathSearch<CostPolicy>)>,
    /// Node expansions shared by all pending searches per tick
    budget_per_tick: usize,
}

impl Default for PathRequests {
    fn default() -> Self {
        Self::new(PATH_BUDGET_PER_TICK)
    }
}

impl PathRequests {
    pub fn new(budget_per_tick: usize) -> Self {
        Self {
            next_ticket: 0,
            pending: VecDeque::new(),
            budget_per_tick: budget_per_tick.max(1),
        }
    }

    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(config.path_budget_per_tick)
    }

    pub fn submit(
        &mut self,
        grid: &TileGrid,
        islands: &IslandTracker,
        request: PathRequest,
    ) -> PathTicket {
        let ticket = PathTicket(self.next_ticket);
        self.next_ticket += 1;
        let search = PathSearch::new(
            grid,
            Some(islands),
            request.start,
            request.goal,
            request.policy,
            request.options,
        );
        self.pending.push_back((ticket, search));
        ticket
    }

    /// Abandon a request; returns false if it already resolved or never existed
    pub fn cancel(&mut self, ticket: PathTicket) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(t, _)| *t != ticket);
        self.pending.len() != before
    }

    pub fn is_pending(&self, ticket: PathTicket) -> bool {
        self.pending.iter().any(|(t, _)| *t == ticket)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Spend one tick's budget in submission order and return finished results
    pub fn advance(&mut self, grid: &TileGrid) -> Vec<PathResolved> {
        let mut budget = self.budget_per_tick;
        let mut resolved = Vec::new();
        while budget > 0 {
            let Some((ticket, search)) = self.pending.front_mut() else {
                break;
            };
            let before = search.expansions();
            let status = search.step(grid, budget);
            budget = budget.saturating_sub(search.expansions() - before);
            let path = match status {
                SearchStatus::Pending => break,
                SearchStatus::Found(path) => Some(path),
                SearchStatus::NotFound => None,
            };
            resolved.push(PathResolved {
                ticket: *ticket,
                path,
            });
            self.pending.pop_front();
        }
        resolved
    }
}

pub fn advance_path_requests(
    grid: Res<TileGrid>,
    mut requests: ResMut<PathRequests>,
    mut writer: MessageWriter<PathResolved>,
) {
    if requests.pending_count() == 0 {
        return;
    }
    let resolved = requests.advance(&grid);
    if !resolved.is_empty() {
        debug!(
            "Resolved {} path requests, {} still pending",
            resolved.len(),
            requests.pending_count()
        );
    }
    writer.write_batch(resolved);
}
