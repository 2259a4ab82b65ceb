//! Persistence models: the plain command-backed model and its caching
//! decorator.

mod caching;
mod crud;

pub use caching::CachingModel;
pub use crud::CrudModel;
