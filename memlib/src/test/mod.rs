mod allocator;
mod controller;
