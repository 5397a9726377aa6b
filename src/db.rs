pub mod user_repo;
pub use user_repo::UserRepository;
pub mod finance_repo;
pub use finance_repo::FinanceRepository;
pub mod maintenance_repo;
pub use maintenance_repo::MaintenanceRepository;
