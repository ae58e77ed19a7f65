fn main() -> anyhow::Result<()> {
    carbs_calc::cli::run()
}
