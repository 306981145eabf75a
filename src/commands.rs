use crate::api::ApiError;
use crate::cli::{Command, CommentsCommand, PostArgs, PostsCommand, ProfileCommand};
use crate::feed::author_name;
use crate::navigation::OAuthCallback;
use crate::redact::redact_secrets;
use crate::session::access_token_expiry_rfc3339;
use crate::state::AppState;
use crate::types::{Comment, ImageUpload, LikeState, PostDraft, ProfileUpdate, Reply, SessionState};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::Path;

type CommandResult<T> = Result<T, ApiError>;

fn to_json<T: Serialize>(value: &T) -> CommandResult<Value> {
  serde_json::to_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

fn comment_json(comment: &Comment) -> CommandResult<Value> {
  let mut value = to_json(comment)?;
  if let Value::Object(obj) = &mut value {
    obj.insert("authorName".to_string(), Value::String(author_name(&comment.author).to_string()));
  }
  Ok(value)
}

async fn load_image(path: &Path) -> CommandResult<ImageUpload> {
  let bytes = tokio::fs::read(path)
    .await
    .map_err(|e| ApiError::InvalidInput(format!("cannot read {}: {e}", path.display())))?;
  let file_name = path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| "upload".to_string());
  let mime = mime_guess::from_path(path).first_or_octet_stream();
  if mime.type_() != mime_guess::mime::IMAGE {
    tracing::warn!(file = %file_name, mime = %mime, "uploading a file that does not look like an image");
  }
  Ok(ImageUpload {
    file_name,
    mime: mime.essence_str().to_string(),
    bytes,
  })
}

async fn post_draft(args: PostArgs) -> CommandResult<PostDraft> {
  let image = match &args.image {
    Some(path) => Some(load_image(path).await?),
    None => None,
  };
  Ok(PostDraft {
    title: args.title,
    content: args.content,
    image,
    img_url: args.img_url,
  })
}

/// Runs one command and wraps the outcome in the JSON envelope. Error
/// messages are redacted before they leave the process.
pub async fn dispatch(state: &AppState, command: Command) -> Reply<Value> {
  match execute(state, command).await {
    Ok(value) => Reply::ok(value),
    Err(e) => {
      let message = redact_secrets(&e.to_string()).into_owned();
      tracing::debug!(code = ?e.code(), error = %message, "command failed");
      Reply::err(e.code(), message)
    }
  }
}

async fn execute(state: &AppState, command: Command) -> CommandResult<Value> {
  let api = &state.api;
  match command {
    Command::Login { email, password } => {
      let user = api.login(&email, &password).await?;
      Ok(json!({ "state": state.session.state(), "user": user }))
    }
    Command::Register {
      username,
      email,
      password,
    } => {
      let user = api.register(&username, &email, &password).await?;
      Ok(json!({ "state": state.session.state(), "user": user }))
    }
    Command::Logout => {
      api.logout().await;
      Ok(json!({ "state": state.session.state() }))
    }
    Command::Whoami => Ok(whoami(state)),
    Command::OauthUrl => Ok(json!({ "url": api.google_login_url() })),
    Command::OauthCallback { url } => {
      let callback = OAuthCallback::parse(&url).ok_or_else(|| {
        ApiError::InvalidInput("not a successful sign-in callback (expected login=success&token=...)".to_string())
      })?;
      let user = api.complete_oauth(&callback).await?;
      Ok(json!({ "state": state.session.state(), "user": user }))
    }
    Command::Posts(cmd) => posts(state, cmd).await,
    Command::Like { post_id } => {
      api.like_post(&post_id).await?;
      to_json(&settled_likes(state, &post_id, true).await)
    }
    Command::Unlike { post_id } => {
      api.unlike_post(&post_id).await?;
      to_json(&settled_likes(state, &post_id, false).await)
    }
    Command::ToggleLike { post_id } => {
      state.likes.load(&post_id).await?;
      to_json(&state.likes.toggle(&post_id).await?)
    }
    Command::Comments(cmd) => comments(state, cmd).await,
    Command::Profile(cmd) => profile(state, cmd).await,
  }
}

/// The like or unlike already went through; a failed read afterwards only
/// costs the fresh count.
async fn settled_likes(state: &AppState, post_id: &str, liked: bool) -> LikeState {
  match state.likes.load(post_id).await {
    Ok(likes) => likes,
    Err(e) => {
      tracing::debug!(post_id, error = %e, "could not reload like state");
      state.likes.assume(post_id, liked)
    }
  }
}

fn whoami(state: &AppState) -> Value {
  let store = state.session.store();
  let expires_at = store
    .access_token()
    .and_then(|token| access_token_expiry_rfc3339(&token));
  json!({
    "state": state.session.state(),
    "route": state.session.navigator().current(),
    "user": state.session.current_user(),
    "storage": store.backend_name(),
    "accessTokenExpiresAt": expires_at,
    "apiUrl": state.api.base_url(),
  })
}

async fn posts(state: &AppState, cmd: PostsCommand) -> CommandResult<Value> {
  let api = &state.api;
  match cmd {
    PostsCommand::List { owner, mine } => {
      let owner = if mine {
        Some(api.signed_in_user()?.id)
      } else {
        owner
      };
      let posts = match owner {
        Some(owner) => api.list_posts_by_owner(&owner).await?,
        None => api.list_posts().await?,
      };
      to_json(&posts)
    }
    PostsCommand::Show { post_id } => {
      let post = api.get_post(&post_id).await?;
      let mut likes = state.likes.seed(&post);
      if api.viewer_id().is_some() {
        match state.likes.load(&post_id).await {
          Ok(loaded) => likes = loaded,
          Err(e) => tracing::debug!(post_id = %post_id, error = %e, "could not load like state"),
        }
      }
      Ok(json!({ "post": post, "likes": likes }))
    }
    PostsCommand::Create(args) => {
      let draft = post_draft(args).await?;
      to_json(&api.create_post(&draft).await?)
    }
    PostsCommand::Edit { post_id, post } => {
      let draft = post_draft(post).await?;
      to_json(&api.update_post(&post_id, &draft).await?)
    }
    PostsCommand::Delete { post_id } => {
      api.delete_post(&post_id).await?;
      Ok(json!({ "deleted": post_id }))
    }
  }
}

async fn comments(state: &AppState, cmd: CommentsCommand) -> CommandResult<Value> {
  match cmd {
    CommentsCommand::List { post_id } => {
      let mut thread = state.comment_thread(&post_id);
      let comments = thread.load().await?;
      Ok(Value::Array(
        comments.iter().map(comment_json).collect::<CommandResult<Vec<_>>>()?,
      ))
    }
    CommentsCommand::Add { post_id, text } => {
      let mut thread = state.comment_thread(&post_id);
      comment_json(thread.add(&text).await?)
    }
    CommentsCommand::Edit {
      post_id,
      comment_id,
      text,
    } => {
      let mut thread = state.comment_thread(&post_id);
      comment_json(thread.edit(&comment_id, &text).await?)
    }
    CommentsCommand::Delete {
      post_id,
      comment_id,
    } => {
      let mut thread = state.comment_thread(&post_id);
      thread.remove(&comment_id).await?;
      Ok(json!({ "deleted": comment_id }))
    }
  }
}

async fn profile(state: &AppState, cmd: ProfileCommand) -> CommandResult<Value> {
  let api = &state.api;
  match cmd {
    ProfileCommand::Show { id, username } => {
      let user = match (id, username) {
        (Some(id), _) => api.get_user(&id).await?,
        (None, Some(username)) => api.get_user_by_username(&username).await?,
        (None, None) => {
          if state.session.state() == SessionState::Anonymous {
            return Err(ApiError::NotSignedIn);
          }
          api.fetch_profile().await?
        }
      };
      to_json(&user)
    }
    ProfileCommand::Update { username, email } => {
      let me = api.signed_in_user()?;
      let update = ProfileUpdate { username, email };
      to_json(&api.update_profile(&me.id, &update).await?)
    }
    ProfileCommand::UploadImage { path } => {
      let me = api.signed_in_user()?;
      let image = load_image(&path).await?;
      to_json(&api.upload_profile_image(&me.id, image).await?)
    }
    ProfileCommand::Delete { yes } => {
      if !yes {
        return Err(ApiError::InvalidInput("pass --yes to delete your account".to_string()));
      }
      let me = api.signed_in_user()?;
      api.delete_user(&me.id).await?;
      Ok(json!({ "deleted": me.id, "state": state.session.state() }))
    }
  }
}
