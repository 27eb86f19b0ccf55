mod e2e_pool;
mod utils;
