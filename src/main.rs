fn main() -> anyhow::Result<()> {
    sprig::cli::run_cli()
}
