// Domain layer: contract/opportunity models and the ports the renewal core depends on.

pub mod model;
pub mod ports;
