fn main() -> anyhow::Result<()> {
    polybench::run()
}
