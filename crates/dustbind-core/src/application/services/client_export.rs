//! Writing compiled templates out for the browser.

use std::{
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, info, instrument, warn};

use crate::{
    application::{
        files::{join_all_detached, write_to_file},
        ports::Filesystem,
    },
    domain::{ClientRenderSettings, DustEngine, OutputFormat, Whitelist},
    error::{DustError, DustResult},
};

/// Write every cached template the whitelist admits to `output`.
///
/// `output` is a directory for [`OutputFormat::Separate`] and a file for
/// [`OutputFormat::Combined`]. Returns the paths written; nothing is
/// written when client rendering is disabled.
#[instrument(skip_all, fields(output = %output.display(), format = ?settings.format))]
pub async fn export_client_templates(
    engine: &DustEngine,
    filesystem: Arc<dyn Filesystem>,
    settings: &ClientRenderSettings,
    output: PathBuf,
) -> DustResult<Vec<PathBuf>> {
    if !settings.enabled {
        debug!("client rendering disabled");
        return Ok(Vec::new());
    }

    let whitelist = Whitelist::new(&settings.whitelist)?;
    let whitespace = engine.config().whitespace;
    let templates: Vec<_> = engine
        .templates()
        .into_iter()
        .filter(|t| whitelist.allows(&t.name))
        .collect();

    let written = match settings.format {
        OutputFormat::Combined => {
            let buffer: String = templates
                .iter()
                .map(|t| t.client_source(whitespace))
                .collect();
            write_to_file(filesystem, output.clone(), buffer, false).await?;
            vec![output]
        }
        OutputFormat::Separate => {
            let mut targets = Vec::with_capacity(templates.len());
            let mut sources = Vec::with_capacity(templates.len());
            for template in &templates {
                match client_path(&output, &template.name) {
                    Some(target) => {
                        targets.push(target);
                        sources.push(template.client_source(whitespace));
                    }
                    None => warn!(
                        template = %template.name,
                        "template name leaves the output directory; not exported"
                    ),
                }
            }
            let writes = targets.iter().zip(sources).map(|(target, source)| {
                write_to_file(Arc::clone(&filesystem), target.clone(), source, false)
            });
            join_all_detached(writes)
                .await
                .map_err(DustError::Application)?;
            targets
        }
    };

    info!(files = written.len(), "exported client templates");
    Ok(written)
}

/// `<output>/<name>.js`, or `None` unless `name` is a plain relative path.
fn client_path(output: &Path, name: &str) -> Option<PathBuf> {
    let plain = !name.is_empty()
        && Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    plain.then(|| output.join(format!("{name}.js")))
}
