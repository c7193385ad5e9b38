use crate::resources::ResourceType;

/// Fixed unit prices; markets buy every resource.
/// Rarer, outer-ring resources sell higher.
pub fn market_price(resource: ResourceType) -> u32 {
    match resource {
        ResourceType::Grain => 4,
        ResourceType::Wood => 6,
        ResourceType::Stone => 8,
        ResourceType::Copper => 15,
        ResourceType::Iron => 20,
        ResourceType::Gold => 45,
        ResourceType::Crystal => 60,
    }
}

/// Revenue for selling `quantity` units
pub fn sale_value(resource: ResourceType, quantity: u32) -> u32 {
    market_price(resource).saturating_mul(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::RESOURCE_DEFS;

    #[test]
    fn every_resource_has_a_price() {
        for def in RESOURCE_DEFS {
            assert!(market_price(def.resource) > 0);
        }
        assert_eq!(sale_value(ResourceType::Gold, 2), 90);
    }
}
