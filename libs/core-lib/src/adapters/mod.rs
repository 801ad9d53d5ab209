// Declare modules within the adapters directory
pub mod argon2_hasher;
pub mod in_memory_refresh_token_store;
pub mod in_memory_tenant_repository;
pub mod in_memory_user_repository;
pub mod postgres_refresh_token_store;
pub mod postgres_tenant_repository;
pub mod postgres_user_repository;

#[cfg(test)]
mod postgres_test_support;
