mod event_generation;
mod non_blocking_predict;
