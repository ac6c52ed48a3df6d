//! Print the header, metadata and a tile summary of a PMTiles archive
//!
//! ```text
//! cargo run --example archive_info -- world.pmtiles
//! cargo run --example archive_info -- https://example.com/world.pmtiles 3/4/2
//! ```

use pmtiles_reader::{PmtilesReader, ReaderConfig};
use tracing_subscriber::EnvFilter;
use url::Url;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(location) = args.next() else {
        eprintln!("usage: archive_info <path-or-url> [z/x/y]");
        std::process::exit(2);
    };

    let config = ReaderConfig::default();
    let reader = match Url::parse(&location) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            PmtilesReader::open_url(url, config).await?
        }
        _ => PmtilesReader::open_path(&location, config).await?,
    };

    let header = reader.header();
    println!("=== {location} ===\n");
    println!("Tile type:        {:?}", header.tile_type);
    println!("Tile compression: {:?}", header.tile_compression);
    println!("Zoom:             {}..={}", header.min_zoom, header.max_zoom);
    println!("Addressed tiles:  {}", header.addressed_tiles_count);
    println!("Tile entries:     {}", header.tile_entries_count);
    println!("Tile contents:    {}", header.tile_contents_count);

    let metadata = reader.metadata().await?;
    println!("\nName:        {}", metadata.name.as_deref().unwrap_or("-"));
    println!("Attribution: {}", metadata.attribution.as_deref().unwrap_or("-"));
    for layer in &metadata.vector_layers {
        println!("Layer {} ({} fields)", layer.id, layer.fields.len());
    }

    if let Some(zxy) = args.next() {
        let parts: Vec<_> = zxy.split('/').map(str::parse::<u32>).collect::<Result<_, _>>()?;
        let [z, x, y] = parts[..] else {
            return Err(format!("expected z/x/y, got {zxy}").into());
        };
        match reader.get_tile_zxy(u8::try_from(z)?, x, y).await? {
            Some(tile) => println!("\nTile {zxy}: {} bytes", tile.len()),
            None => println!("\nTile {zxy}: not present"),
        }
    } else {
        let mut total_bytes = 0u64;
        let count = reader
            .for_each_tile(|tile| total_bytes += tile.data.len() as u64)
            .await?;
        println!("\n{count} tiles, {total_bytes} bytes of tile data");
    }

    Ok(())
}
