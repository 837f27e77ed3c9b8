use ghcore_config::Config;

/// Writes the configuration template to `~/ghcore/config.json`.
#[derive(Debug, Clone, Copy)]
pub struct InitStrategy;

impl super::CommandStrategy for InitStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let path = Config::create_config()?;

        println!("Created config file at: {}", path.display());
        println!();
        println!("Next steps:");
        println!("   1. Add one or more GitHub tokens under github.tokens");
        println!("   2. Optionally set database.url to an event-log database");
        println!("   3. Run 'ghcore resolve --category Issue_PR <TEXT>'");
        Ok(())
    }
}
