//! Rules acceptance flow that ends in role grants.

pub(crate) mod roles;
pub(crate) mod stepper;
pub(crate) mod token;
