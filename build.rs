use std::path::{Path, PathBuf};

fn main() {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    println!("cargo:rerun-if-changed=.env");
    for key in ["DAPP_ADDRESS_BOOK", "DAPP_RPC_URL", "DAPP_CHAIN_ID"] {
        println!("cargo:rerun-if-env-changed={key}");
    }

    for key in ["DAPP_RPC_URL", "DAPP_CHAIN_ID"] {
        if let Ok(val) = std::env::var(key) {
            println!("cargo:rustc-env={key}={val}");
        }
    }

    let address_book = match std::env::var("DAPP_ADDRESS_BOOK") {
        Ok(source) if source.trim_start().starts_with('{') => source,
        Ok(path) => {
            println!("cargo:rerun-if-changed={path}");
            match std::fs::read_to_string(Path::new(&path)) {
                Ok(json) => json,
                Err(err) => {
                    println!("cargo:warning=cannot read address book {path}: {err}");
                    "{}".to_string()
                }
            }
        }
        Err(_) => {
            println!("cargo:warning=DAPP_ADDRESS_BOOK not set, no contract addresses baked in");
            "{}".to_string()
        }
    };

    let out_dir = PathBuf::from(std::env::var("OUT_DIR").unwrap_or_else(|_| ".".into()));
    if let Err(err) = std::fs::write(out_dir.join("address_book.json"), address_book) {
        panic!("writing address book: {err}");
    }
}
