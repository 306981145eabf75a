use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// PhotoShare - command line client for the PhotoShare REST API
#[derive(Debug, Parser)]
#[command(name = "photoshare")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "PHOTOSHARE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Pretty-print the JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PHOTOSHARE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and sign in
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "PHOTOSHARE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out and clear the stored session
    Logout,

    /// Show the session state and cached user
    Whoami,

    /// Print the Google sign-in URL to open in a browser
    OauthUrl,

    /// Finish Google sign-in from the redirect URL
    OauthCallback {
        /// Redirect URL or its query string (`login=success&token=...`)
        url: String,
    },

    /// Browse and manage posts
    #[command(subcommand)]
    Posts(PostsCommand),

    /// Like a post
    Like { post_id: String },

    /// Remove your like from a post
    Unlike { post_id: String },

    /// Flip your like on a post and print the settled state
    ToggleLike { post_id: String },

    /// Read and write comments
    #[command(subcommand)]
    Comments(CommentsCommand),

    /// View and edit user profiles
    #[command(subcommand)]
    Profile(ProfileCommand),
}

#[derive(Debug, Subcommand)]
pub enum PostsCommand {
    /// List posts, optionally only those of one owner
    List {
        #[arg(long)]
        owner: Option<String>,
        /// Only posts of the signed-in user
        #[arg(long, conflicts_with = "owner")]
        mine: bool,
    },
    /// Show one post with its like state
    Show { post_id: String },
    Create(PostArgs),
    Edit {
        post_id: String,
        #[command(flatten)]
        post: PostArgs,
    },
    Delete { post_id: String },
}

#[derive(Debug, Args)]
pub struct PostArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long, default_value = "")]
    pub content: String,
    /// Image file to upload
    #[arg(long)]
    pub image: Option<PathBuf>,
    /// Keep an existing image URL instead of uploading
    #[arg(long, conflicts_with = "image")]
    pub img_url: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum CommentsCommand {
    List { post_id: String },
    Add { post_id: String, text: String },
    Edit {
        post_id: String,
        comment_id: String,
        text: String,
    },
    Delete { post_id: String, comment_id: String },
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Show a profile (yours when no user is given)
    Show {
        #[arg(long)]
        id: Option<String>,
        #[arg(long, conflicts_with = "id")]
        username: Option<String>,
    },
    /// Change your username or email
    Update {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Upload a new profile picture
    UploadImage { path: PathBuf },
    /// Delete your account
    Delete {
        #[arg(long)]
        yes: bool,
    },
}
