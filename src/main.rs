use std::process::ExitCode;

fn main() -> anyhow::Result<ExitCode> {
    comment_vault_lib::run()
}
