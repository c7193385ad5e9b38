use bevy::prelude::*;

use crate::config::WorldConfig;
use crate::constants::STARTING_MONEY;

/// Money for construction, credited by market sales
#[derive(Resource, Debug, Clone)]
pub struct Treasury {
    money: u32,
}

impl Default for Treasury {
    fn default() -> Self {
        Treasury::new(STARTING_MONEY)
    }
}

impl Treasury {
    pub fn new(amount: u32) -> Self {
        Treasury { money: amount }
    }

    pub fn from_config(config: &WorldConfig) -> Self {
        Treasury::new(config.starting_money)
    }

    pub fn total(&self) -> u32 {
        self.money
    }

    pub fn add(&mut self, amount: u32) {
        self.money = self.money.saturating_add(amount);
    }

    pub fn subtract(&mut self, amount: u32) {
        self.money = self.money.saturating_sub(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_subtract_saturate() {
        let mut treasury = Treasury::new(100);
        treasury.add(50);
        assert_eq!(treasury.total(), 150);
        treasury.subtract(500);
        assert_eq!(treasury.total(), 0);
    }
}
