//! Media upload and ORCID lookup commands.

use tracing::info;
use trowel_rest::{MediaUpload, OrcidLookup, is_orcid};

use crate::cli::{OrcidArgs, UploadArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{format_orcid, format_upload, render};

pub(crate) async fn handle_upload(ctx: &AppContext, args: UploadArgs) -> CliResult<()> {
    let mut upload = MediaUpload::from_path(&args.file, args.uuid).await?;
    upload.media_type = args.media_type;
    upload.media_type_uuid = args.media_type_uuid;
    upload.creator = args.creator;
    upload.captured_at = args.captured_at;
    upload.license = args.license;
    upload.description = args.description;
    upload.parent_type = args.parent_type;
    upload.parent = args.parent;

    let endpoint = args
        .endpoint
        .unwrap_or_else(|| ctx.config.conversion_endpoint.clone());
    let uuid = upload.uuid;
    let response = ctx.client.upload_media(&endpoint, upload).await?;
    info!(%uuid, endpoint = %endpoint, "media uploaded");
    render(&format_upload(&response, ctx.output)?);
    Ok(())
}

pub(crate) async fn handle_orcid(ctx: &AppContext, args: OrcidArgs) -> CliResult<()> {
    if !is_orcid(&args.id) {
        return Err(CliError::validation(format!(
            "'{}' is not an ORCID iD",
            args.id
        )));
    }
    let redirect = if args.via_redirect {
        let redirect = ctx.config.redirect_endpoint.clone().ok_or_else(|| {
            CliError::validation("--via-redirect needs TROWEL_REDIRECT_ENDPOINT to be set")
        })?;
        Some(redirect)
    } else {
        None
    };
    let lookup = OrcidLookup::public()?.through_redirect(redirect);
    let record = ctx.client.fetch_orcid_record(&lookup, &args.id).await?;
    render(&format_orcid(&args.id, &record, ctx.output)?);
    Ok(())
}
