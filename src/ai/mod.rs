//! AI collaborators: context rendering, generation providers, and the
//! single-candidate test generation loop.

pub mod context;
pub mod provider;
pub mod test_gen;
