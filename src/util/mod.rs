pub mod mem_watcher;
