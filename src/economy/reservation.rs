/// A quantity with a reserved share that is committed but not yet spent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourcePool {
    pub total: u32,
    pub reserved: u32,
}

impl ResourcePool {
    pub fn new(total: u32) -> Self {
        Self { total, reserved: 0 }
    }

    /// Get available (unreserved) amount
    pub fn available(&self) -> u32 {
        self.total.saturating_sub(self.reserved)
    }

    /// Try to reserve amount - returns true if successful
    /// Returns false if insufficient resources available
    pub fn try_reserve(&mut self, amount: u32) -> bool {
        if amount <= self.available() {
            self.reserved += amount;
            true
        } else {
            false
        }
    }

    /// Release a reservation
    pub fn release(&mut self, amount: u32) {
        self.reserved = self.reserved.saturating_sub(amount);
    }

    /// Spend up to `amount` of the reservation; returns how much was spent
    pub fn consume_reserved(&mut self, amount: u32) -> u32 {
        let spent = amount.min(self.reserved);
        self.reserved -= spent;
        self.total = self.total.saturating_sub(spent);
        spent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservation_lifecycle() {
        let mut pool = ResourcePool::new(10);
        assert!(pool.try_reserve(6));
        assert!(!pool.try_reserve(5));
        assert_eq!(pool.available(), 4);

        assert_eq!(pool.consume_reserved(4), 4);
        assert_eq!(pool.total, 6);
        assert_eq!(pool.reserved, 2);

        pool.release(5);
        assert_eq!(pool.reserved, 0);
        assert_eq!(pool.available(), 6);
    }
}
