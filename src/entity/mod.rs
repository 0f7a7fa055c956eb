//! SeaORM entity definitions for PostgreSQL database.

pub mod run;
pub mod skip_rule;
pub mod test_case;
pub mod test_health;
pub mod test_result;
