pub mod ddl;
pub mod generator;
pub mod key;
pub mod policy;

pub use ddl::{permutation_table_name, synthesize_ddl};
pub use generator::{PermutationSet, generate};
pub use key::PermutationKey;
pub use policy::PermutationPolicy;
