mod allocator;

use vsign_rs::app::App;

fn main() -> anyhow::Result<()> {
    App::init()?.execute()
}
