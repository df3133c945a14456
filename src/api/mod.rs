pub mod cli;
pub mod http;

pub use cli::{Cli, CliError, CliHandler, Commands};
pub use http::{
    add_wallets, get_wallets, router, AddWalletsRequest, ApiError, AppState, MessageResponse, RegistryServer,
    WalletsUpdatedResponse, WatchlistRegistry,
};
