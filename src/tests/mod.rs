mod utils;

mod dashboards;
mod session;
