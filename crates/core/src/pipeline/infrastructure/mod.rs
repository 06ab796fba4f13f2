pub mod ordered_worker_pool;
