pub mod arr;
pub mod cycle_date;
pub mod likelihood;
pub mod renewal;
pub mod retry;
pub mod trigger;

pub use crate::domain::ports::{
    Clock, ContractReader, OpportunityReader, OpportunityWriter, ServiceLineItemReader,
};
pub use crate::utils::error::Result;
