fn main() -> anyhow::Result<()> {
    magic_aa_wallet::app::run()
}
