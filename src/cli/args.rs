use clap::Parser;

const EXAMPLES: &str = "\
Examples:
  Track search and play:
    $ bohemian -u myusername -p mypassword Bee Gees Stayin' Alive

  Track search and play (use saved credentials):
    $ bohemian Bee Gees Stayin' Alive

  Interactive mode:
    $ bohemian -i";

/// bohemian - A command-line Rhapsody music player
#[derive(Parser, Debug)]
#[command(name = "bohemian")]
#[command(author, version, about, long_about = None)]
#[command(after_help = EXAMPLES)]
pub struct Cli {
    /// Interactive mode. Upon successful login, credentials are saved to ~/.bohemian/credentials.
    #[arg(short, long)]
    pub interactive: bool,

    /// Rhapsody username
    #[arg(short, long)]
    pub username: Option<String>,

    /// Rhapsody password
    #[arg(short, long)]
    pub password: Option<String>,

    /// Single-play track search terms
    #[arg(value_name = "SEARCH TERMS")]
    pub search: Vec<String>,
}

impl Cli {
    /// Search terms joined into one query, if any were given
    pub fn query(&self) -> Option<String> {
        let query = self.search.join(" ");
        let query = query.trim();
        (!query.is_empty()).then(|| query.to_string())
    }
}
