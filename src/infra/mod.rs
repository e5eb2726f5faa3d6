//! Infrastructure layer: PostgreSQL through SeaORM, Redis, and the
//! Unit of Work that ties repositories together.

pub mod cache;
pub mod db;
pub mod repositories;
pub mod unit_of_work;

pub use cache::Cache;
pub use db::{Database, Migrator};
pub use repositories::{
    AttemptRecord, ClassRepository, ProgressRepository, SchoolRepository, SkillTreeRepository,
    SubjectRepository, UserRepository,
};
pub use unit_of_work::{
    Persistence, TransactionContext, TxFuture, TxProgressRepository, TxSchoolRepository,
    TxSkillTreeRepository, TxUserRepository, UnitOfWork,
};

#[cfg(any(test, feature = "test-utils"))]
pub use unit_of_work::{
    MockTxProgressRepository, MockTxSchoolRepository, MockTxSkillTreeRepository,
    MockTxUserRepository,
};
