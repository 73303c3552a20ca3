mod address;
mod manager;
mod state;
